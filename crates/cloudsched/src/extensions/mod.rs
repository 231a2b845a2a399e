pub mod random_workload;
