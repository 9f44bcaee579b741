mod test_from_yaml;
mod test_end_to_end;
