pub mod achievement;
pub mod one_on_one_record;
pub mod pitch_record;
pub mod progress_snapshot;
pub mod revenue_entry;
pub mod scheduled_meeting;
pub mod stage_history;
pub mod startup;
pub mod user;
pub mod user_identity;
pub mod user_role;
pub mod user_secret;
