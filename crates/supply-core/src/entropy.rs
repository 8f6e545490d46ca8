//! Randomness source and the synthetic demo data drawn from it.
//!
//! Everything random in the ledger goes through [`Entropy`], so a seeded
//! `StdRng` makes a whole session reproducible.

use crate::constants::*;
use crate::{Coordinates, PricePoint, Role, User};
use rand::Rng;

pub trait Entropy: Send {
    /// Uniform integer in `lo..=hi`.
    fn int_in(&mut self, lo: i64, hi: i64) -> i64;
    /// Uniform float in `[0, 1)`.
    fn unit(&mut self) -> f64;
    fn fill(&mut self, buf: &mut [u8]);

    /// Uniform float in `lo..hi`.
    fn float_in(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.unit()
    }

    /// Symmetric perturbation factor `1 ± spread/2`.
    fn jitter(&mut self, spread: f64) -> f64 {
        1.0 + (self.unit() - 0.5) * spread
    }
}

impl<R: Rng + Send> Entropy for R {
    fn int_in(&mut self, lo: i64, hi: i64) -> i64 {
        self.gen_range(lo..=hi)
    }

    fn unit(&mut self) -> f64 {
        self.gen::<f64>()
    }

    fn fill(&mut self, buf: &mut [u8]) {
        self.fill_bytes(buf);
    }
}

pub fn int_in(rng: &mut dyn Entropy, (lo, hi): (i64, i64)) -> i64 {
    rng.int_in(lo, hi)
}

/// `0x` followed by 40 hex chars.
pub fn address(rng: &mut dyn Entropy) -> String {
    let mut raw = [0u8; 20];
    rng.fill(&mut raw);
    format!("0x{}", hex::encode(raw))
}

pub fn product_id(rng: &mut dyn Entropy) -> String {
    let mut raw = [0u8; 16];
    rng.fill(&mut raw);
    uuid::Builder::from_random_bytes(raw)
        .into_uuid()
        .to_string()
}

pub fn coordinates(rng: &mut dyn Entropy) -> Coordinates {
    Coordinates {
        lat: rng.float_in(25.0, 45.0),
        lng: rng.float_in(-120.0, -70.0),
    }
}

/// Straight line from `start` to `end`, both ends included.
pub fn route(start: Coordinates, end: Coordinates) -> Vec<Coordinates> {
    (0..=ROUTE_STEPS)
        .map(|i| {
            let t = i as f64 / ROUTE_STEPS as f64;
            Coordinates {
                lat: start.lat + (end.lat - start.lat) * t,
                lng: start.lng + (end.lng - start.lng) * t,
            }
        })
        .collect()
}

/// One point per day for the last `days` days plus today, as a ±2.5% random walk.
pub fn price_history(rng: &mut dyn Entropy, base: u64, days: u64, now: u64) -> Vec<PricePoint> {
    let mut current = base as f64;
    (0..=days)
        .rev()
        .map(|i| {
            current *= rng.jitter(0.05);
            PricePoint {
                timestamp: now.saturating_sub(i * DAY_MILLIS),
                price: current.round().max(0.0) as u64,
            }
        })
        .collect()
}

/// The fixed demo roster: one user per role.
pub fn demo_users(rng: &mut dyn Entropy) -> Vec<User> {
    Role::ALL
        .into_iter()
        .map(|role| {
            let label = role.as_str();
            let mut chars = label.chars();
            let title = match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            };
            User {
                address: address(rng),
                role,
                name: format!("Demo {title}"),
                balance: STARTING_BALANCE,
                trading_volume: 0,
                reputation: rng.float_in(DEFAULT_REPUTATION, MAX_REPUTATION),
                certifications: vec!["ISO 9001".into(), "Supply Chain Security".into()],
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn seeded_entropy_is_reproducible() {
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        assert_eq!(address(&mut a), address(&mut b));
        assert_eq!(product_id(&mut a), product_id(&mut b));
    }

    #[test]
    fn address_shape() {
        let mut rng = StdRng::seed_from_u64(1);
        let addr = address(&mut rng);
        assert_eq!(addr.len(), 42);
        assert!(addr.starts_with("0x"));
    }

    #[test]
    fn product_id_is_uuid_v4() {
        let mut rng = StdRng::seed_from_u64(1);
        let id = product_id(&mut rng);
        let parsed = uuid::Uuid::parse_str(&id).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn coordinates_within_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let c = coordinates(&mut rng);
            assert!((25.0..45.0).contains(&c.lat));
            assert!((-120.0..-70.0).contains(&c.lng));
        }
    }

    #[test]
    fn route_interpolates_endpoints() {
        let start = Coordinates { lat: 30.0, lng: -100.0 };
        let end = Coordinates { lat: 40.0, lng: -80.0 };
        let r = route(start, end);
        assert_eq!(r.len(), ROUTE_STEPS + 1);
        assert_eq!(r[0], start);
        assert_eq!(r[ROUTE_STEPS], end);
        assert!((r[1].lat - 32.0).abs() < 1e-9);
    }

    #[test]
    fn price_history_is_daily_and_bounded() {
        let mut rng = StdRng::seed_from_u64(11);
        let now = 1_700_000_000_000;
        let history = price_history(&mut rng, 50_000, PRICE_HISTORY_DAYS, now);
        assert_eq!(history.len(), PRICE_HISTORY_DAYS as usize + 1);
        assert_eq!(history.last().unwrap().timestamp, now);
        for pair in history.windows(2) {
            assert_eq!(pair[1].timestamp - pair[0].timestamp, DAY_MILLIS);
            let ratio = pair[1].price as f64 / pair[0].price as f64;
            assert!((0.97..1.03).contains(&ratio), "step ratio {ratio}");
        }
    }

    #[test]
    fn demo_roster_has_one_user_per_role() {
        let mut rng = StdRng::seed_from_u64(5);
        let users = demo_users(&mut rng);
        assert_eq!(users.len(), 3);
        assert_eq!(users[0].name, "Demo Manufacturer");
        assert_eq!(users[2].role, Role::Retailer);
        for u in &users {
            assert_eq!(u.balance, STARTING_BALANCE);
            assert!((DEFAULT_REPUTATION..MAX_REPUTATION).contains(&u.reputation));
        }
    }
}
