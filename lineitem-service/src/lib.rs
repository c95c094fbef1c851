pub mod config;
pub mod controller;
pub mod form;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
