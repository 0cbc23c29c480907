mod config;
mod degraded;
mod round;
