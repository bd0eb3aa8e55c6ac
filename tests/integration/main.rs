//! Integration test harness

mod scrape_tests;
