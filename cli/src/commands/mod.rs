mod entry;
mod goal;
mod helpers;
mod profile;
mod store;
mod summary;
mod weight;

pub(crate) use entry::{cmd_delete, cmd_entries, cmd_log};
pub(crate) use goal::{cmd_goal_set, cmd_goal_show};
pub(crate) use profile::{
    ProfileUpdate, cmd_profile_create, cmd_profile_list, cmd_profile_move, cmd_profile_rename,
    cmd_profile_show, cmd_profile_update,
};
pub(crate) use store::{cmd_init, cmd_setting_get, cmd_setting_set};
pub(crate) use summary::{cmd_history, cmd_totals};
pub(crate) use weight::{cmd_weight_delete, cmd_weight_history, cmd_weight_log, cmd_weight_progress};
