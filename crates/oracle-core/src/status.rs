//! Status Generator
//!
//! Produces the flight status an agent reports for a request. Generators are
//! stateless from the caller's point of view and chosen independently per
//! submission; agents answering the same request may disagree.
//!
//! The random draw covers five codes (`Unknown` through `LateTechnical`).
//! `LateOther` is a defined code but is never drawn.

use std::sync::Mutex;

use ledger_gateway::{InboundRequest, StatusCode};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Codes the random generators draw from, uniformly.
pub const DRAWABLE_STATUS_CODES: [StatusCode; 5] = [
    StatusCode::Unknown,
    StatusCode::OnTime,
    StatusCode::LateAirline,
    StatusCode::LateWeather,
    StatusCode::LateTechnical,
];

/// Maps a request to the status one agent will submit.
pub trait StatusGenerator: Send + Sync {
    fn generate(&self, request: &InboundRequest) -> StatusCode;
}

fn draw<R: Rng + ?Sized>(rng: &mut R) -> StatusCode {
    DRAWABLE_STATUS_CODES[rng.gen_range(0..DRAWABLE_STATUS_CODES.len())]
}

/// Uniform draw from the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomStatusGenerator;

impl StatusGenerator for RandomStatusGenerator {
    fn generate(&self, _request: &InboundRequest) -> StatusCode {
        draw(&mut rand::thread_rng())
    }
}

/// Uniform draw from a seeded RNG, for reproducible runs.
#[derive(Debug)]
pub struct SeededStatusGenerator {
    rng: Mutex<StdRng>,
}

impl SeededStatusGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl StatusGenerator for SeededStatusGenerator {
    fn generate(&self, _request: &InboundRequest) -> StatusCode {
        match self.rng.lock() {
            Ok(mut rng) => draw(&mut *rng),
            // A poisoned lock still holds a usable RNG.
            Err(poisoned) => draw(&mut *poisoned.into_inner()),
        }
    }
}

/// Always answers with the same code.
#[derive(Debug, Clone, Copy)]
pub struct FixedStatusGenerator(pub StatusCode);

impl StatusGenerator for FixedStatusGenerator {
    fn generate(&self, _request: &InboundRequest) -> StatusCode {
        self.0
    }
}
