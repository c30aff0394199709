mod reader;
mod writer;


pub(crate) use self::{
    reader::{ErrorHandler, LogReadError, ReadRecord, WriteLogReader},
    writer::{LogWriteError, WriteLogWriter},
};
