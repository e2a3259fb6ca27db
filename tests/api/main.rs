mod helpers;
mod subscribers;
