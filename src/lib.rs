pub mod binder;
pub mod config;
pub mod constants;
pub mod definition;
pub mod filter;
pub mod list_watcher;
pub mod memory_cluster;
pub mod node;
pub mod normalize;
pub mod pod;
pub mod prober_client;
pub mod prober_locator;
pub mod quota;
pub mod random;
pub mod scheduler;
pub mod simple_scheduler;
pub mod strategy;
pub mod work_queue;

#[cfg(test)]
mod test_support;

#[cfg(test)]
mod config_test;
#[cfg(test)]
mod memory_cluster_test;
