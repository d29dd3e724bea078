// Demo inventory used by the in-memory store and by tests

use chrono::{DateTime, TimeDelta, Utc};

use crate::models::{Condition, Listing, Location};

// 2024-06-01T00:00:00Z; listing N is N days older than this
const NEWEST_LISTING_TS: i64 = 1_717_200_000;

type Row = (
    &'static str, // make
    &'static str, // model
    u32,          // year
    u32,          // price
    u32,          // mileage (unique across rows)
    Condition,
    &'static str, // body type
    &'static str, // fuel type
    &'static str, // transmission
    &'static str, // city
    &'static str, // state
    f64,          // arbitrage score
);

const ROWS: [Row; 24] = [
    ("Toyota", "Camry", 2021, 24_500, 31_200, Condition::Used, "Sedan", "Gasoline", "Automatic", "Austin", "TX", 82.5),
    ("Honda", "Civic", 2021, 21_900, 28_450, Condition::Certified, "Sedan", "Gasoline", "CVT", "Dallas", "TX", 77.0),
    ("Ford", "F-150", 2022, 41_800, 18_900, Condition::Used, "Truck", "Gasoline", "Automatic", "Houston", "TX", 69.4),
    ("Tesla", "Model 3", 2023, 38_990, 9_800, Condition::Used, "Sedan", "Electric", "Automatic", "San Jose", "CA", 88.1),
    ("Toyota", "RAV4 Hybrid", 2024, 35_000, 1_200, Condition::New, "SUV", "Hybrid", "CVT", "Denver", "CO", 71.3),
    ("Chevrolet", "Camaro", 2019, 25_000, 42_300, Condition::Used, "Coupe", "Gasoline", "Manual", "Phoenix", "AZ", 64.0),
    ("BMW", "X5", 2020, 45_500, 39_750, Condition::Certified, "SUV", "Gasoline", "Automatic", "Miami", "FL", 58.8),
    ("Honda", "CR-V", 2022, 29_300, 22_100, Condition::Used, "SUV", "Gasoline", "CVT", "Austin", "TX", 80.2),
    ("Ford", "Mustang Mach-E", 2023, 43_250, 7_400, Condition::Certified, "SUV", "Electric", "Automatic", "Seattle", "WA", 74.6),
    ("Toyota", "Tacoma", 2020, 32_750, 47_900, Condition::Used, "Truck", "Gasoline", "Automatic", "Boise", "ID", 85.9),
    ("Hyundai", "Elantra", 2023, 19_800, 15_600, Condition::Used, "Sedan", "Gasoline", "Automatic", "Atlanta", "GA", 79.5),
    ("Subaru", "Outback", 2021, 27_400, 36_050, Condition::Used, "Wagon", "Gasoline", "CVT", "Portland", "OR", 73.2),
    ("Toyota", "Camry", 2024, 29_900, 450, Condition::New, "Sedan", "Hybrid", "CVT", "Dallas", "TX", 66.7),
    ("Jeep", "Wrangler", 2019, 28_600, 51_300, Condition::Used, "SUV", "Gasoline", "Manual", "Denver", "CO", 61.4),
    ("Kia", "Telluride", 2022, 38_400, 24_800, Condition::Certified, "SUV", "Gasoline", "Automatic", "Nashville", "TN", 76.8),
    ("Nissan", "Altima", 2020, 17_950, 45_200, Condition::Used, "Sedan", "Gasoline", "CVT", "Orlando", "FL", 68.3),
    ("Ford", "Escape", 2024, 31_200, 900, Condition::New, "SUV", "Hybrid", "Automatic", "Chicago", "IL", 62.9),
    ("Mazda", "CX-5", 2021, 26_300, 33_700, Condition::Used, "SUV", "Gasoline", "Automatic", "Austin", "TX", 81.1),
    ("Volkswagen", "Golf GTI", 2020, 23_400, 38_600, Condition::Used, "Hatchback", "Gasoline", "Manual", "Boston", "MA", 70.0),
    ("Honda", "Accord", 2023, 30_800, 12_300, Condition::Certified, "Sedan", "Hybrid", "CVT", "Columbus", "OH", 75.4),
    ("Ram", "1500", 2021, 39_900, 35_400, Condition::Used, "Truck", "Diesel", "Automatic", "Oklahoma City", "OK", 67.2),
    ("Chevrolet", "Bolt EV", 2022, 22_700, 19_950, Condition::Used, "Hatchback", "Electric", "Automatic", "Sacramento", "CA", 84.3),
    ("Audi", "Q5", 2024, 52_100, 2_300, Condition::New, "SUV", "Gasoline", "Automatic", "Scottsdale", "AZ", 55.6),
    ("Lexus", "RX 350", 2019, 33_900, 54_800, Condition::Certified, "SUV", "Gasoline", "Automatic", "Charlotte", "NC", 72.7),
];

fn listing_from_row(index: usize, row: &Row) -> Listing {
    let (make, model, year, price, mileage, condition, body_type, fuel_type, transmission, city, state, score) =
        *row;
    let id = format!("veh-{:03}", index + 1);
    let created_at = DateTime::<Utc>::UNIX_EPOCH
        + TimeDelta::seconds(NEWEST_LISTING_TS - index as i64 * 86_400);

    Listing {
        description: format!(
            "{condition} {year} {make} {model} with {mileage} miles, located in {city}, {state}.",
            condition = condition.as_str(),
        ),
        images: vec![format!("/static/vehicles/{id}/1.jpg")],
        id,
        make: make.to_string(),
        model: model.to_string(),
        trim: None,
        year,
        price,
        mileage,
        condition,
        body_type: body_type.to_string(),
        fuel_type: fuel_type.to_string(),
        transmission: transmission.to_string(),
        exterior_color: None,
        location: Location {
            city: city.to_string(),
            state: state.to_string(),
        },
        arbitrage_score: score,
        created_at,
    }
}

/// Deterministic demo inventory, newest first.
pub fn demo_listings() -> Vec<Listing> {
    ROWS.iter()
        .enumerate()
        .map(|(i, row)| listing_from_row(i, row))
        .collect()
}
