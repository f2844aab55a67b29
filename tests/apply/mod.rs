mod dry_run;
mod idempotence;
mod mandatory_failure;
mod optional_packages;
mod repair;
mod service_health;
mod preflight_gate;
mod retries;
