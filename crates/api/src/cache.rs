pub mod workload_cache;
