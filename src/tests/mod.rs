mod test_keyed_mutex;
mod test_window_tracker;
