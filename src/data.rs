use rusqlite::Connection;
use std::sync::{Arc, Mutex};

pub type DBConnection = Arc<Mutex<Connection>>;
pub type TaskID = String;
pub type CategoryID = String;

/// Local calendar day formatted as `YYYY-MM-DD`.
pub type DayKey = String;
