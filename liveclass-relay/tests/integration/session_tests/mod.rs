mod test_class_over_relay;
