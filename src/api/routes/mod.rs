pub mod days;
pub mod leaderboards;
pub mod meta;
