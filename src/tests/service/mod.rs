mod feed_test;
mod post_test;
