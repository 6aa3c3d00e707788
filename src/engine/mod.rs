pub mod fanout;
pub mod mailbox;
pub mod priority;
pub mod queue;
pub mod state;
pub mod task;
pub mod timer;

pub use fanout::FanOut;
pub use mailbox::{BaseCommand, Mailbox, MailboxSender, BASE_MAILBOX_CAPACITY};
pub use priority::{CoreAffinity, Priority};
pub use queue::{FrameQueue, QueueHandle, QueueId};
pub use state::{StateSnapshot, SystemState, TaskState};
pub use task::{Runnable, Task, TaskSpec, DEFAULT_STACK_SIZE};
pub use timer::{period_for_rate, Pacer, SampleTimer};
