use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use time::{Date, Duration, OffsetDateTime};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Price range of a generated booking, inclusive.
pub const TOTAL_PRICE_RANGE: std::ops::RangeInclusive<u32> = 100..=1000;

/// How far check-in may lie in the past, and check-out in the future.
pub const MAX_DATE_OFFSET_DAYS: i64 = 10;

const FIRST_NAMES: &[&str] = &[
    "Ada", "Alan", "Barbara", "Carmen", "Dennis", "Edsger", "Frances", "Grace", "Hedy", "Ivan",
    "Jean", "Ken", "Linus", "Margaret", "Niklaus", "Olga", "Radia", "Sophie", "Tim", "Yukihiro",
];

const LAST_NAMES: &[&str] = &[
    "Allen", "Bartik", "Cerf", "Dijkstra", "Engelbart", "Floyd", "Goldberg", "Hopper", "Iverson",
    "Johnson", "Knuth", "Lamarr", "Liskov", "Matsumoto", "Perlman", "Ritchie", "Thompson",
    "Torvalds", "Wilson", "Wirth",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdditionalNeed {
    Breakfast,
    Lunch,
    Dinner,
}

impl AdditionalNeed {
    pub const ALL: [AdditionalNeed; 3] = [
        AdditionalNeed::Breakfast,
        AdditionalNeed::Lunch,
        AdditionalNeed::Dinner,
    ];
}

impl fmt::Display for AdditionalNeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AdditionalNeed::Breakfast => "Breakfast",
            AdditionalNeed::Lunch => "Lunch",
            AdditionalNeed::Dinner => "Dinner",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingDates {
    #[serde(with = "iso_date")]
    pub checkin: Date,
    #[serde(with = "iso_date")]
    pub checkout: Date,
}

/// Body of a create or update request. Generated fresh for every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingPayload {
    pub firstname: String,
    pub lastname: String,
    pub totalprice: u32,
    pub depositpaid: bool,
    pub bookingdates: BookingDates,
    pub additionalneeds: AdditionalNeed,
}

impl BookingPayload {
    /// A random booking checking in within the last ten days and out within the next ten.
    pub fn fake<R: Rng + ?Sized>(rng: &mut R, today: Date) -> Self {
        let checkin = today - Duration::days(rng.gen_range(0..=MAX_DATE_OFFSET_DAYS));
        let checkout = today + Duration::days(rng.gen_range(0..=MAX_DATE_OFFSET_DAYS));

        Self {
            firstname: pick(rng, FIRST_NAMES).to_string(),
            lastname: pick(rng, LAST_NAMES).to_string(),
            totalprice: rng.gen_range(TOTAL_PRICE_RANGE),
            depositpaid: rng.gen(),
            bookingdates: BookingDates { checkin, checkout },
            additionalneeds: *pick(rng, &AdditionalNeed::ALL),
        }
    }

    /// [`BookingPayload::fake`] with the thread RNG and today's UTC date.
    pub fn generate() -> Self {
        Self::fake(&mut rand::thread_rng(), today())
    }
}

pub fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

fn pick<'a, R: Rng + ?Sized, T>(rng: &mut R, items: &'a [T]) -> &'a T {
    // NOTE: Every list passed in is a non-empty constant.
    items.choose(rng).unwrap_or(&items[0])
}
