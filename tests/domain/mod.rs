mod stem_target_test;
