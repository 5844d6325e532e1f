//! WAL test suite

mod entry_tests;
