mod test_analyze;
mod test_helpers;
