use std::collections::HashSet;

/// First of `base`, `base1`, `base2`, ... not present in `existing`.
pub fn unique_alias<'a, I>(existing: I, base: &str) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let taken: HashSet<&str> = existing.into_iter().collect();
    if !taken.contains(base) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{base}{n}"))
        .find(|candidate| !taken.contains(candidate.as_str()))
        .unwrap_or_else(|| base.to_string())
}

#[cfg(test)]
mod tests {
    use super::unique_alias;

    #[test]
    fn test_unique_alias_keeps_free_base() {
        assert_eq!(unique_alias(["Title"], "itemsList"), "itemsList");
    }

    #[test]
    fn test_unique_alias_appends_counter() {
        let existing = ["itemsList", "itemsList1", "Title"];
        assert_eq!(unique_alias(existing, "itemsList"), "itemsList2");
    }
}
