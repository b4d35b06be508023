pub mod db;
pub mod endpoints;
