mod configuration;
mod limits;
mod malformed;
mod skip_policy;
