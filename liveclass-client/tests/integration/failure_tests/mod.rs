mod test_media_denied;
mod test_relay_failures;
