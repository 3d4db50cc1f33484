//! PostgreSQL repository tests.
//!
//! Ignored by default; run with a database available:
//! `DATABASE_URL=postgres://... cargo test -- --ignored`

mod postgres_tests;
