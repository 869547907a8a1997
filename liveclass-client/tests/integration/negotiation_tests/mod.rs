mod test_candidate_order;
mod test_end_to_end_class;
mod test_glare;
