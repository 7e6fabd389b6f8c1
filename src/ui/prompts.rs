use anyhow::Result;
use dialoguer::Select;

/// Arrow-key Yes/No selection.
///
/// # Returns
/// * `Ok(true)` if the user selects "Yes"
/// * `Ok(false)` if the user selects "No"
pub fn confirm(prompt: &str, default_yes: bool) -> Result<bool> {
    let items = vec!["Yes", "No"];
    let default_index = if default_yes { 0 } else { 1 };

    let selection = Select::new()
        .with_prompt(prompt)
        .items(&items)
        .default(default_index)
        .interact()?;

    Ok(selection == 0)
}
