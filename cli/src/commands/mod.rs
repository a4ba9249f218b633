mod foods;
mod helpers;
mod import;
mod search;

pub(crate) use foods::{cmd_list, cmd_portion, cmd_show};
pub(crate) use import::cmd_import;
pub(crate) use search::{cmd_best, cmd_search};
