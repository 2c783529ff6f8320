// HTTP adapter over the query path

pub mod handlers;
pub mod models;
pub mod routes;
