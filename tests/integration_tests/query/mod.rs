mod mod_bulk;
mod mod_updates;
mod telemetry_tests;
