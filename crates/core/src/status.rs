//! Status helper enums mapping to SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding `*_statuses` database table.

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Job lifecycle state. Terminal once every file task has resolved.
    JobState {
        Pending = 1,
        Running = 2,
        Completed = 3,
        CompletedWithErrors = 4,
        Failed = 5,
        Cancelled = 6,
    }
}

define_status_enum! {
    /// Per-file task execution state.
    TaskState {
        Queued = 1,
        Running = 2,
        Succeeded = 3,
        Failed = 4,
        Cancelled = 5,
    }
}

define_status_enum! {
    /// Worker node availability status.
    WorkerStatus {
        Idle = 1,
        Busy = 2,
        Offline = 3,
        Draining = 4,
    }
}

define_status_enum! {
    /// Export lifecycle state for the ingestion handshake.
    ExportState {
        Pending = 1,
        Packaged = 2,
        Submitted = 3,
        Delivered = 4,
        Rejected = 5,
        PollTimeout = 6,
        Failed = 7,
    }
}

impl JobState {
    /// Whether no further transitions can occur.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::CompletedWithErrors | Self::Failed | Self::Cancelled
        )
    }
}

impl TaskState {
    /// Whether no further transitions can occur.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}
