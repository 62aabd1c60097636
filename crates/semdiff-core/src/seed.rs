//! Default scale catalogue written on first initialisation.

use tracing::debug;

use crate::error::Result;
use crate::storage::traits::StorageEngine;
use crate::storage::types::ScaleInput;

/// `(id, left_label, right_label)` of the default scales, in display order.
pub const DEFAULT_SCALES: [(&str, &str, &str); 8] = [
    ("interesse", "Intéressé", "Pas intéressé"),
    ("motivant", "Motivant", "Démotivant"),
    ("stimulant", "Stimulant", "Ennuyeux"),
    ("actif", "Actif", "Paresseux"),
    ("perseverance", "Persévérance", "Abandon"),
    ("soigneux", "Soigneux", "Négligent"),
    ("autonome", "Autonome", "Dépendant"),
    ("respectueux", "Respectueux", "Irrespectueux"),
];

/// Insert every default scale that does not exist yet.
///
/// Existing scales are left untouched, so the call is safe to repeat.
///
/// # Returns
///
/// Returns the number of scales inserted.
pub fn seed_default_scales<S: StorageEngine + ?Sized>(storage: &S) -> Result<usize> {
    let mut inserted = 0;
    for (id, left, right) in DEFAULT_SCALES {
        if storage.get_scale(id)?.is_some() {
            continue;
        }
        storage.upsert_scale(&ScaleInput::new(id, left, right))?;
        inserted += 1;
    }
    debug!(inserted, "default scales seeded");
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStorage;

    #[test]
    fn test_seed_is_idempotent_and_ordered() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        assert_eq!(seed_default_scales(&storage).unwrap(), 8);
        assert_eq!(seed_default_scales(&storage).unwrap(), 0);

        let ids: Vec<String> = storage
            .list_scales()
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        let expected: Vec<&str> = DEFAULT_SCALES.iter().map(|(id, _, _)| *id).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_seed_keeps_customised_scale() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        storage
            .upsert_scale(&ScaleInput::new("actif", "Busy", "Idle").with_range(0.0, 10.0))
            .unwrap();
        assert_eq!(seed_default_scales(&storage).unwrap(), 7);
        let actif = storage.get_scale("actif").unwrap().unwrap();
        assert_eq!(actif.left_label, "Busy");
        assert_eq!(actif.max, 10.0);
    }
}
