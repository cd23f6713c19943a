mod helpers;
mod import;
mod log;
mod plan;
mod settings;

pub(crate) use import::cmd_import_legacy;
pub(crate) use log::{cmd_delete, cmd_history, cmd_log};
pub(crate) use plan::{cmd_plan_generate, cmd_plan_show, cmd_plan_toggle};
pub(crate) use settings::{
    cmd_lock_add, cmd_lock_list, cmd_lock_remove, cmd_lock_set_enabled, cmd_settings_set,
    cmd_settings_show,
};
