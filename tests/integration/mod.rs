mod binding_tests;
mod config_tests;
mod convert_tests;
mod equivalence_tests;
mod library_tests;
mod oracle_tests;
mod rewrite_tests;
