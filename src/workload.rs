//! Synthetic record generation for the write phases.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::Fields;

pub const MIN_AGE: u32 = 18;
pub const MAX_AGE: u32 = 100;

/// Field carrying the value compared during read-back verification.
pub const VERIFY_FIELD: &str = "email";

const FIRST_NAMES: &[&str] = &[
    "Ada", "Alan", "Barbara", "Claude", "Dennis", "Edsger", "Frances", "Grace", "Hedy", "Ivan",
    "John", "Katherine", "Ken", "Linus", "Margaret", "Niklaus", "Radia", "Shafi", "Tim", "Yukihiro",
];

const LAST_NAMES: &[&str] = &[
    "Allen", "Backus", "Cerf", "Dijkstra", "Engelbart", "Floyd", "Goldwasser", "Hamilton",
    "Hopper", "Johnson", "Kahn", "Knuth", "Lamport", "Liskov", "Lovelace", "Perlman", "Ritchie",
    "Shannon", "Thompson", "Wirth",
];

const DOMAINS: &[&str] = &["example.com", "example.org", "example.net", "mail.test"];

/// A freshly generated record; has no identity until written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyntheticRecord {
    #[serde(rename = "Name")]
    pub name: String,
    pub email: String,
    pub age: u32,
}

impl SyntheticRecord {
    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("Name".into(), Value::from(self.name.as_str()));
        fields.insert(VERIFY_FIELD.into(), Value::from(self.email.as_str()));
        fields.insert("age".into(), Value::from(self.age));
        fields
    }
}

/// Produces records with independently random field values.
///
/// Emails are not guaranteed unique; verification keys off the stored
/// document id.
pub struct RecordGenerator {
    rng: StdRng,
}

impl RecordGenerator {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    pub fn next_record(&mut self) -> SyntheticRecord {
        let first = FIRST_NAMES.choose(&mut self.rng).copied().unwrap_or("Ada");
        let last = LAST_NAMES.choose(&mut self.rng).copied().unwrap_or("Lovelace");
        let domain = DOMAINS.choose(&mut self.rng).copied().unwrap_or("example.com");
        let suffix: u16 = self.rng.gen_range(0..1000);

        SyntheticRecord {
            name: format!("{first} {last}"),
            email: format!(
                "{}.{}{suffix:03}@{domain}",
                first.to_ascii_lowercase(),
                last.to_ascii_lowercase()
            ),
            age: self.rng.gen_range(MIN_AGE..=MAX_AGE),
        }
    }

    pub fn generate_batch(&mut self, n: usize) -> Vec<SyntheticRecord> {
        (0..n).map(|_| self.next_record()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_has_exact_size_and_valid_fields() {
        let mut generator = RecordGenerator::new(Some(7));
        let batch = generator.generate_batch(250);
        assert_eq!(batch.len(), 250);

        for record in &batch {
            assert!((MIN_AGE..=MAX_AGE).contains(&record.age));
            assert!(record.name.contains(' '));
            let (local, domain) = record.email.split_once('@').expect("email has @");
            assert!(local.contains('.'));
            assert!(DOMAINS.contains(&domain));
        }
    }

    #[test]
    fn empty_batch_is_empty() {
        assert!(RecordGenerator::new(None).generate_batch(0).is_empty());
    }

    #[test]
    fn seeded_generators_are_reproducible() {
        let a = RecordGenerator::new(Some(42)).generate_batch(20);
        let b = RecordGenerator::new(Some(42)).generate_batch(20);
        assert_eq!(a, b);
    }

    #[test]
    fn fields_use_service_keys() {
        let record = SyntheticRecord {
            name: "Grace Hopper".into(),
            email: "grace.hopper001@example.com".into(),
            age: 85,
        };
        let fields = record.to_fields();
        assert_eq!(fields["Name"], "Grace Hopper");
        assert_eq!(fields[VERIFY_FIELD], "grace.hopper001@example.com");
        assert_eq!(fields["age"], 85);
    }
}
