use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

/// Items that can appear in a suggestion list.
pub trait Searchable {
    /// Text fields a query may match, in display-priority order.
    fn search_fields(&self) -> Vec<&str>;

    /// Text written into the input when this item is picked.
    fn search_text(&self) -> String;
}

/// Trimmed, lowercased query. Matching is case-insensitive throughout.
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Up to `max_results` items accepted by `matcher`, in source order.
///
/// Returns nothing for a blank query. The matcher receives the normalized
/// query.
pub fn suggest<'a, I, M>(query: &str, dataset: &'a [I], matcher: M, max_results: usize) -> Vec<(usize, &'a I)>
where
    M: Fn(&I, &str) -> bool,
{
    let normalized = normalize_query(query);
    if normalized.is_empty() {
        return Vec::new();
    }
    dataset
        .iter()
        .enumerate()
        .filter(|(_, item)| matcher(*item, &normalized))
        .take(max_results)
        .collect()
}

/// Case-insensitive substring match over every search field.
pub fn contains_any<I: Searchable>(item: &I, normalized_query: &str) -> bool {
    item.search_fields()
        .iter()
        .any(|field| field.to_lowercase().contains(normalized_query))
}

/// Label showing the highest-priority field that contains the query, with
/// the primary field as context when they differ.
pub fn first_matching_field<I: Searchable>(item: &I, normalized_query: &str) -> String {
    let fields = item.search_fields();
    let primary = fields.first().copied().unwrap_or_default();
    match fields
        .iter()
        .find(|field| field.to_lowercase().contains(normalized_query))
    {
        Some(field) if *field != primary => format!("{} ({})", field, primary),
        _ => primary.to_string(),
    }
}

/// Skim-style fuzzy ranking, best score first.
pub struct FuzzyRanker {
    matcher: SkimMatcherV2,
}

impl Default for FuzzyRanker {
    fn default() -> Self {
        Self::new()
    }
}

impl FuzzyRanker {
    pub fn new() -> Self {
        Self {
            matcher: SkimMatcherV2::default().ignore_case(),
        }
    }

    /// Best score across the item's fields.
    pub fn score<I: Searchable>(&self, item: &I, normalized_query: &str) -> Option<i64> {
        item.search_fields()
            .iter()
            .filter_map(|field| self.matcher.fuzzy_match(field, normalized_query))
            .max()
    }

    /// Top `max_results` matches by descending score. Equal scores keep
    /// source order.
    pub fn rank<'a, I: Searchable>(&self, query: &str, dataset: &'a [I], max_results: usize) -> Vec<(usize, &'a I)> {
        let normalized = normalize_query(query);
        if normalized.is_empty() {
            return Vec::new();
        }
        let mut scored: Vec<(i64, usize, &'a I)> = dataset
            .iter()
            .enumerate()
            .filter_map(|(idx, item)| self.score(item, &normalized).map(|s| (s, idx, item)))
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored
            .into_iter()
            .take(max_results)
            .map(|(_, idx, item)| (idx, item))
            .collect()
    }

    /// Fuzzy ordering over the items `matcher` accepts. Accepted items the
    /// fuzzy scorer cannot place rank last, in source order.
    pub fn rank_by<'a, I, M>(&self, query: &str, dataset: &'a [I], matcher: M, max_results: usize) -> Vec<(usize, &'a I)>
    where
        I: Searchable,
        M: Fn(&I, &str) -> bool,
    {
        let normalized = normalize_query(query);
        if normalized.is_empty() {
            return Vec::new();
        }
        let mut scored: Vec<(Option<i64>, usize, &'a I)> = dataset
            .iter()
            .enumerate()
            .filter(|(_, item)| matcher(*item, &normalized))
            .map(|(idx, item)| (self.score(item, &normalized), idx, item))
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored
            .into_iter()
            .take(max_results)
            .map(|(_, idx, item)| (idx, item))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Drug {
        name: String,
        code: String,
    }

    impl Searchable for Drug {
        fn search_fields(&self) -> Vec<&str> {
            vec![self.name.as_str(), self.code.as_str()]
        }

        fn search_text(&self) -> String {
            self.name.clone()
        }
    }

    fn drug(name: &str, code: &str) -> Drug {
        Drug {
            name: name.to_string(),
            code: code.to_string(),
        }
    }

    #[test]
    fn test_bounded_to_max_results_in_source_order() {
        let dataset: Vec<Drug> = (0..500)
            .map(|i| {
                if i % 10 == 0 {
                    drug(&format!("Amoxicillin {}", i), &format!("AMX-{:03}", i))
                } else {
                    drug(&format!("Paracetamol {}", i), &format!("PCM-{:03}", i))
                }
            })
            .collect();

        let matched = dataset.iter().filter(|d| contains_any(*d, "amox")).count();
        assert_eq!(matched, 50);

        let results = suggest("Amox", &dataset, contains_any::<Drug>, 5);
        let indices: Vec<usize> = results.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![0, 10, 20, 30, 40]);
    }

    #[test]
    fn test_blank_query_suggests_nothing() {
        let dataset = vec![drug("Insulin", "INS-1")];
        assert!(suggest("   ", &dataset, contains_any::<Drug>, 5).is_empty());
    }

    #[test]
    fn test_matching_is_case_insensitive_on_any_field() {
        let dataset = vec![drug("Insulin glargine", "INS-100"), drug("Ibuprofen", "IBU-200")];
        let results = suggest("ibu-2", &dataset, contains_any::<Drug>, 5);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].1.name, "Ibuprofen");
    }

    #[test]
    fn test_formatter_surfaces_matched_field() {
        let item = drug("Ibuprofen", "IBU-200");
        assert_eq!(first_matching_field(&item, "ibu-"), "IBU-200 (Ibuprofen)");
        assert_eq!(first_matching_field(&item, "ibu"), "Ibuprofen");
    }

    #[test]
    fn test_fuzzy_rank_prefers_closer_match() {
        let dataset = vec![
            drug("Metoprolol", "MTP-1"),
            drug("Metformin", "MTF-1"),
            drug("Mefenamic acid", "MFA-1"),
        ];
        let ranked = FuzzyRanker::new().rank("metf", &dataset, 5);
        assert_eq!(ranked[0].1.name, "Metformin");
        assert!(ranked.len() <= 3);
    }
}
