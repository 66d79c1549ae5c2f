//! Tier classifier: partitions students into priority and regular cohorts.
//!
//! Pure and order-preserving. The only failure is a student record without a
//! level.

use ea_core::entities::Student;
use ea_core::variables::EngineParams;

use crate::AllocError;

/// The two cohorts, each in input order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cohorts<'a> {
    pub priority: Vec<&'a Student>,
    pub regular: Vec<&'a Student>,
}

impl<'a> Cohorts<'a> {
    pub fn len(&self) -> usize {
        self.priority.len() + self.regular.len()
    }

    pub fn is_empty(&self) -> bool {
        self.priority.is_empty() && self.regular.is_empty()
    }

    /// Priority students first, then regular; each paired with its flag.
    pub fn in_precedence_order(&self) -> impl Iterator<Item = (&'a Student, bool)> + '_ {
        self.priority
            .iter()
            .map(|s| (*s, true))
            .chain(self.regular.iter().map(|s| (*s, false)))
    }
}

pub fn classify<'a, I>(students: I, params: &EngineParams) -> Result<Cohorts<'a>, AllocError>
where
    I: IntoIterator<Item = &'a Student>,
{
    let mut out = Cohorts::default();
    for s in students {
        let level = s.level.ok_or_else(|| AllocError::MissingLevel(s.id.clone()))?;
        if params.is_priority(level, s.protected) {
            out.priority.push(s);
        } else {
            out.regular.push(s);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn st(id: &str, level: Option<u8>, protected: bool) -> Student {
        Student { id: id.parse().unwrap(), level, protected }
    }

    #[test]
    fn partitions_preserving_order() {
        let roster = vec![
            st("s1", Some(1), false),
            st("s2", Some(4), false),
            st("s3", Some(3), true),
            st("s4", Some(3), false),
            st("s5", Some(4), true),
        ];
        let c = classify(&roster, &EngineParams::default()).unwrap();
        let pri: Vec<&str> = c.priority.iter().map(|s| s.id.as_str()).collect();
        let reg: Vec<&str> = c.regular.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(pri, vec!["s2", "s3", "s5"]);
        assert_eq!(reg, vec!["s1", "s4"]);
        assert_eq!(c.len(), 5);

        let flags: Vec<bool> = c.in_precedence_order().map(|(_, p)| p).collect();
        assert_eq!(flags, vec![true, true, true, false, false]);
    }

    #[test]
    fn missing_level_aborts() {
        let roster = vec![st("s1", Some(4), false), st("s2", None, true)];
        assert_eq!(
            classify(&roster, &EngineParams::default()),
            Err(AllocError::MissingLevel("s2".parse().unwrap()))
        );
    }

    #[test]
    fn classification_is_deterministic() {
        let roster: Vec<Student> = (0..20u8)
            .map(|i| st(&format!("s{i}"), Some(1 + i % 4), i % 3 == 0))
            .collect();
        let p = EngineParams::default();
        assert_eq!(classify(&roster, &p).unwrap(), classify(&roster, &p).unwrap());
    }
}
