//! Science pack costs of technologies.

use crate::inventory::{ItemCounts, add_count};
use crate::registry::GameData;
use std::collections::BTreeSet;

/// Science packs consumed researching `tech` alone. `None` for an unknown
/// technology.
pub fn tech_cost(data: &GameData, tech: &str) -> Option<ItemCounts> {
    let t = data.technology(tech)?;
    let mut cost = ItemCounts::new();
    for ing in &t.unit.ingredients {
        add_count(&mut cost, &ing.name, t.unit.count.saturating_mul(ing.amount));
    }
    Some(cost)
}

/// Science packs for `tech` and every prerequisite not yet in `researched`.
/// Shared prerequisites are counted once.
pub fn tech_full_cost(data: &GameData, researched: &BTreeSet<String>, tech: &str) -> Option<ItemCounts> {
    let mut seen = researched.clone();
    full_cost(data, &mut seen, tech)
}

fn full_cost(data: &GameData, seen: &mut BTreeSet<String>, tech: &str) -> Option<ItemCounts> {
    if seen.contains(tech) {
        return Some(ItemCounts::new());
    }
    let mut cost = tech_cost(data, tech)?;
    let t = data.technology(tech)?;
    for prereq in &t.prerequisites {
        for (pack, n) in full_cost(data, seen, prereq)? {
            add_count(&mut cost, &pack, n);
        }
        seen.insert(prereq.clone());
    }
    Some(cost)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::vanilla;

    #[test]
    fn single_tech() {
        let data = vanilla();
        let cost = tech_cost(&data, "automation").unwrap();
        assert_eq!(cost.get("automation-science-pack"), Some(&10));
        assert!(tech_cost(&data, "nonexistent").is_none());
    }

    #[test]
    fn full_cost_includes_prerequisites() {
        let data = vanilla();
        let cost = tech_full_cost(&data, &BTreeSet::new(), "electronics").unwrap();
        assert_eq!(cost.get("automation-science-pack"), Some(&40));
    }

    #[test]
    fn researched_prerequisites_are_free() {
        let data = vanilla();
        let researched: BTreeSet<String> = ["automation".to_string()].into();
        let cost = tech_full_cost(&data, &researched, "electronics").unwrap();
        assert_eq!(cost.get("automation-science-pack"), Some(&30));

        let all: BTreeSet<String> = ["automation".to_string(), "electronics".to_string()].into();
        assert!(tech_full_cost(&data, &all, "electronics").unwrap().is_empty());
    }

    #[test]
    fn shared_prerequisite_counted_once() {
        let data = vanilla();
        // fast-inserter needs electronics and logistics; both need automation.
        let cost = tech_full_cost(&data, &BTreeSet::new(), "fast-inserter").unwrap();
        assert_eq!(cost.get("automation-science-pack"), Some(&(10 + 30 + 30 + 20)));
    }
}
