//! Shared test harness modules for the POI store CLI.

use super::*;

mod helpers;
mod unit;
