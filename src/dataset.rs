//! Generated rows used to seed and feed the database suites.

use rand::distr::Alphanumeric;
use rand::Rng;

/// One row of the `people` table (the id is assigned by the database).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    pub name: String,
    pub email: String,
    pub age: i64,
}

impl Person {
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        let name: String = (0..10)
            .map(|_| char::from(rng.sample(Alphanumeric)))
            .collect();
        let email = format!("{}@example.com", name.to_lowercase());
        Self {
            name,
            email,
            age: rng.random_range(18..90),
        }
    }
}

/// `count` random people.
pub fn people(count: usize) -> Vec<Person> {
    let mut rng = rand::rng();
    (0..count).map(|_| Person::random(&mut rng)).collect()
}

/// Cycles through a fixed pool of rows so trials do not pay for generation.
#[derive(Debug, Clone)]
pub struct PersonCycle {
    pool: Vec<Person>,
    next: usize,
}

impl PersonCycle {
    pub fn new(size: usize) -> Self {
        Self {
            pool: people(size.max(1)),
            next: 0,
        }
    }

    pub fn next_person(&mut self) -> &Person {
        let index = self.next;
        self.next = (self.next + 1) % self.pool.len();
        &self.pool[index]
    }
}

/// Cycles through ids `1..=max`, matching rows seeded into an empty table.
#[derive(Debug, Clone, Copy)]
pub struct IdCycle {
    base: i64,
    max: i64,
    current: i64,
}

impl IdCycle {
    pub fn new(max: usize) -> Self {
        Self::with_offset(max, 0)
    }

    /// Cycles through `offset + 1..=offset + max` instead.
    pub fn with_offset(max: usize, offset: usize) -> Self {
        Self {
            base: offset as i64,
            max: (max as i64).max(1),
            current: 0,
        }
    }

    pub fn next_id(&mut self) -> i64 {
        self.current = self.current % self.max + 1;
        self.base + self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_person() {
        let person = Person::random(&mut rand::rng());
        assert_eq!(person.name.len(), 10);
        assert!(person.email.ends_with("@example.com"));
        assert!((18..90).contains(&person.age));
    }

    #[test]
    fn test_id_cycle_wraps() {
        let mut ids = IdCycle::new(3);
        let seen: Vec<i64> = (0..7).map(|_| ids.next_id()).collect();
        assert_eq!(seen, vec![1, 2, 3, 1, 2, 3, 1]);

        let mut ids = IdCycle::with_offset(2, 10);
        let seen: Vec<i64> = (0..3).map(|_| ids.next_id()).collect();
        assert_eq!(seen, vec![11, 12, 11]);
    }

    #[test]
    fn test_person_cycle_wraps() {
        let mut cycle = PersonCycle::new(2);
        let first = cycle.next_person().clone();
        cycle.next_person();
        assert_eq!(cycle.next_person(), &first);
    }
}
