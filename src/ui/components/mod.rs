mod column_picker;
mod command_input;
mod confirm;
pub(crate) mod input;
mod key_result;
mod search_input;
mod toast;

pub use column_picker::ColumnPicker;
pub use command_input::{CommandEvent, CommandInput};
pub use confirm::{ConfirmDialog, ConfirmEvent};
pub use input::{InputResult, TextInput};
pub use key_result::KeyResult;
pub use search_input::{SearchEvent, SearchInput};
pub use toast::{Notifier, Toast, Toasts};
