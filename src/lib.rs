pub mod aggregate;
pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod invoice_gen;
pub mod mailer;
pub mod models;
pub mod optimistic;
pub mod seed;
pub mod storage;
pub mod tasks;
pub mod ui;
