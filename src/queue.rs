//! Advanced Queuing with RAW payloads

use crate::{Connection, Error, Result, oci::*};
use libc::c_void;
use std::{ffi::CString, ptr};

/// When an enqueued message becomes visible, or a dequeue takes effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Immediate,
    OnCommit,
}

impl Visibility {
    fn from_oci(code: u32) -> Self {
        if code == OCI_ENQ_IMMEDIATE { Visibility::Immediate } else { Visibility::OnCommit }
    }

    fn to_oci(self) -> u32 {
        match self {
            Visibility::Immediate => OCI_ENQ_IMMEDIATE,
            Visibility::OnCommit  => OCI_ENQ_ON_COMMIT,
        }
    }
}

/// Locking behavior of a dequeue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeqMode {
    /// Read without locking
    Browse,
    /// Read and lock for a later remove
    Locked,
    /// Read and delete
    Remove,
    /// Delete without returning the payload
    RemoveNoData,
}

impl DeqMode {
    fn from_oci(code: u32) -> Self {
        match code {
            OCI_DEQ_BROWSE        => DeqMode::Browse,
            OCI_DEQ_LOCKED        => DeqMode::Locked,
            OCI_DEQ_REMOVE_NODATA => DeqMode::RemoveNoData,
            _                     => DeqMode::Remove,
        }
    }

    fn to_oci(self) -> u32 {
        match self {
            DeqMode::Browse       => OCI_DEQ_BROWSE,
            DeqMode::Locked       => OCI_DEQ_LOCKED,
            DeqMode::Remove       => OCI_DEQ_REMOVE,
            DeqMode::RemoveNoData => OCI_DEQ_REMOVE_NODATA,
        }
    }
}

/// Position of the message a dequeue retrieves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeqNavigation {
    FirstMsg,
    NextTransaction,
    NextMsg,
}

impl DeqNavigation {
    fn from_oci(code: u32) -> Self {
        match code {
            OCI_DEQ_FIRST_MSG        => DeqNavigation::FirstMsg,
            OCI_DEQ_NEXT_TRANSACTION => DeqNavigation::NextTransaction,
            _                        => DeqNavigation::NextMsg,
        }
    }

    fn to_oci(self) -> u32 {
        match self {
            DeqNavigation::FirstMsg        => OCI_DEQ_FIRST_MSG,
            DeqNavigation::NextTransaction => OCI_DEQ_NEXT_TRANSACTION,
            DeqNavigation::NextMsg         => OCI_DEQ_NEXT_MSG,
        }
    }
}

/// Enqueue options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnqOptions {
    pub visibility: Visibility,
}

/// Dequeue options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeqOptions {
    /// Consumer of a multi-consumer queue
    pub consumer: String,
    /// Correlation identifier messages must match
    pub correlation: String,
    pub mode: DeqMode,
    pub navigation: DeqNavigation,
    pub visibility: Visibility,
    /// Seconds to wait for a message; `None` waits forever
    pub wait: Option<u32>,
}

/// A queued message with a RAW payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    pub raw: Vec<u8>,
    pub correlation: String,
    pub priority: i32,
    /// Seconds before the message becomes available
    pub delay: i32,
    /// Seconds the message stays available, -1 for no expiration
    pub expiration: i32,
    pub exception_queue: String,
    /// Number of dequeue attempts, set by dequeue
    pub attempts: i32,
}

/**
A RAW payload queue.

# Example

```no_run
# fn main() -> goracle::Result<()> {
use goracle::{Connection, Message, Queue};

let conn = Connection::open("scott/tiger@orcl")?;
let mut queue = Queue::new(&conn, "TEST_Q", "")?;
queue.enqueue(&[Message { raw: b"hello".to_vec(), expiration: -1, ..Message::default() }])?;
let mut received = vec![Message::default(); 1];
let n = queue.dequeue(&mut received)?;
assert_eq!(n, 1);
# Ok(()) }
```
*/
pub struct Queue {
    conn: Connection,
    name: CString,
    payload_tdo: Ptr<OCIType>,
    enq_options: Descriptor<OCIAQEnqOptions>,
    deq_options: Descriptor<OCIAQDeqOptions>,
    props: Descriptor<OCIAQMsgProperties>,
    payload: Ptr<OCIRaw>,
}

impl Queue {
    /**
    Opens queue `name`. `payload_type` names the payload object type as
    `[SCHEMA.]TYPE`; an empty name is `SYS.RAW`.
    */
    pub fn new(conn: &Connection, name: &str, payload_type: &str) -> Result<Self> {
        let name = CString::new(name).map_err(|_| Error::msg(format!("invalid queue name {:?}", name)))?;
        let (schema, type_name) = match payload_type {
            "" => ("SYS", "RAW"),
            name => match name.split_once('.') {
                Some((schema, type_name)) => (schema, type_name),
                None => ("", name),
            },
        };
        let env = conn.env();
        let enq_options = Descriptor::<OCIAQEnqOptions>::new(env.env_ptr())?;
        let deq_options = Descriptor::<OCIAQDeqOptions>::new(env.env_ptr())?;
        let props = Descriptor::<OCIAQMsgProperties>::new(env.env_ptr())?;

        let mut tdo = ptr::null_mut::<OCIType>();
        conn.with_session(|svc, env| {
            env.check_status(unsafe {
                OCITypeByName(
                    env.env_ptr(), env.err_ptr(), svc,
                    schema.as_ptr(), schema.len() as u32,
                    type_name.as_ptr(), type_name.len() as u32,
                    ptr::null(), 0, OCI_DURATION_SESSION, OCI_TYPEGET_HEADER,
                    &mut tdo
                )
            }, "TypeByName")
        })?;
        tracing::debug!(queue = ?name, schema, type_name, "queue opened");

        Ok(Self {
            conn: conn.clone(),
            name,
            payload_tdo: Ptr::new(tdo),
            enq_options,
            deq_options,
            props,
            payload: Ptr::null(),
        })
    }

    pub fn name(&self) -> String {
        self.name.to_string_lossy().into_owned()
    }

    pub fn enq_options(&self) -> Result<EnqOptions> {
        let err = self.conn.env().err_ptr();
        let visibility : u32 = self.enq_options.get_attr(OCI_ATTR_VISIBILITY, err)?;
        Ok(EnqOptions { visibility: Visibility::from_oci(visibility) })
    }

    pub fn set_enq_options(&mut self, options: &EnqOptions) -> Result<()> {
        let err = self.conn.env().err_ptr();
        self.enq_options.set_attr(OCI_ATTR_VISIBILITY, options.visibility.to_oci(), err)
    }

    pub fn deq_options(&self) -> Result<DeqOptions> {
        let err = self.conn.env().err_ptr();
        let opts = &self.deq_options;
        let consumer    : String = opts.get_attr(OCI_ATTR_CONSUMER_NAME, err)?;
        let correlation : String = opts.get_attr(OCI_ATTR_CORRELATION, err)?;
        let mode        : u32 = opts.get_attr(OCI_ATTR_DEQ_MODE, err)?;
        let navigation  : u32 = opts.get_attr(OCI_ATTR_NAVIGATION, err)?;
        let visibility  : u32 = opts.get_attr(OCI_ATTR_VISIBILITY, err)?;
        let wait        : i32 = opts.get_attr(OCI_ATTR_WAIT, err)?;
        Ok(DeqOptions {
            consumer,
            correlation,
            mode: DeqMode::from_oci(mode),
            navigation: DeqNavigation::from_oci(navigation),
            visibility: Visibility::from_oci(visibility),
            wait: if wait < 0 { None } else { Some(wait as u32) },
        })
    }

    pub fn set_deq_options(&mut self, options: &DeqOptions) -> Result<()> {
        let err = self.conn.env().err_ptr();
        let opts = &self.deq_options;
        if !options.consumer.is_empty() {
            opts.set_attr(OCI_ATTR_CONSUMER_NAME, options.consumer.as_str(), err)?;
        }
        if !options.correlation.is_empty() {
            opts.set_attr(OCI_ATTR_CORRELATION, options.correlation.as_str(), err)?;
        }
        opts.set_attr(OCI_ATTR_DEQ_MODE, options.mode.to_oci(), err)?;
        opts.set_attr(OCI_ATTR_NAVIGATION, options.navigation.to_oci(), err)?;
        opts.set_attr(OCI_ATTR_VISIBILITY, options.visibility.to_oci(), err)?;
        self.set_wait(options.wait.map_or(OCI_DEQ_WAIT_FOREVER, |secs| secs.min(i32::MAX as u32) as i32))
    }

    fn set_wait(&self, wait: i32) -> Result<()> {
        self.deq_options.set_attr(OCI_ATTR_WAIT, wait, self.conn.env().err_ptr())
    }

    fn set_message_properties(&self, msg: &Message) -> Result<()> {
        let err = self.conn.env().err_ptr();
        let props = &self.props;
        props.set_attr(OCI_ATTR_PRIORITY, msg.priority, err)?;
        props.set_attr(OCI_ATTR_DELAY, msg.delay, err)?;
        props.set_attr(OCI_ATTR_EXPIRATION, msg.expiration, err)?;
        props.set_attr(OCI_ATTR_CORRELATION, msg.correlation.as_str(), err)?;
        if !msg.exception_queue.is_empty() {
            props.set_attr(OCI_ATTR_EXCEPTION_QUEUE, msg.exception_queue.as_str(), err)?;
        }
        Ok(())
    }

    fn message_properties(&self) -> Result<Message> {
        let err = self.conn.env().err_ptr();
        let props = &self.props;
        Ok(Message {
            raw: Vec::new(),
            correlation: props.get_attr(OCI_ATTR_CORRELATION, err)?,
            priority: props.get_attr(OCI_ATTR_PRIORITY, err)?,
            delay: props.get_attr(OCI_ATTR_DELAY, err)?,
            expiration: props.get_attr(OCI_ATTR_EXPIRATION, err)?,
            exception_queue: props.get_attr(OCI_ATTR_EXCEPTION_QUEUE, err)?,
            attempts: props.get_attr(OCI_ATTR_ATTEMPTS, err)?,
        })
    }

    fn payload_bytes(&self) -> Vec<u8> {
        let raw = self.payload.get();
        if raw.is_null() {
            return Vec::new();
        }
        let env = self.conn.env().env_ptr();
        unsafe {
            let data = OCIRawPtr(env, raw);
            let size = OCIRawSize(env, raw) as usize;
            if data.is_null() || size == 0 {
                Vec::new()
            } else {
                std::slice::from_raw_parts(data, size).to_vec()
            }
        }
    }

    /// Enqueues the messages one by one with the current enqueue options.
    pub fn enqueue(&mut self, messages: &[Message]) -> Result<()> {
        for msg in messages {
            self.set_message_properties(msg)?;
            let env = self.conn.env();
            let res = unsafe {
                OCIRawAssignBytes(env.env_ptr(), env.err_ptr(), msg.raw.as_ptr(), msg.raw.len() as u32, self.payload.as_mut_ptr())
            };
            env.check_status(res, "RawAssignBytes")?;

            let name = self.name.as_ptr() as *const u8;
            let (enq_options, props, tdo) = (self.enq_options.get(), self.props.get(), self.payload_tdo.get());
            let mut payload = self.payload.get() as *mut c_void;
            let mut ind = OCI_IND_NOTNULL;
            let mut ind_ptr = &mut ind as *mut i16 as *mut c_void;
            self.conn.with_session(|svc, env| {
                env.check_status(unsafe {
                    OCIAQEnq(svc, env.err_ptr(), name, enq_options, props, tdo, &mut payload, &mut ind_ptr, ptr::null_mut(), OCI_DEFAULT)
                }, "AQEnq")
            })?;
        }
        tracing::debug!(queue = ?self.name, count = messages.len(), "enqueued");
        Ok(())
    }

    /**
    Dequeues up to `messages.len()` messages with the current dequeue options.
    Only the first message waits for the configured time. Returns the number
    of messages received.
    */
    pub fn dequeue(&mut self, messages: &mut [Message]) -> Result<usize> {
        let wait : i32 = self.deq_options.get_attr(OCI_ATTR_WAIT, self.conn.env().err_ptr())?;
        let res = self.dequeue_into(messages, wait);
        if wait != OCI_DEQ_NO_WAIT && messages.len() > 1 {
            self.set_wait(wait)?;
        }
        let count = res?;
        tracing::debug!(queue = ?self.name, count, "dequeued");
        Ok(count)
    }

    fn dequeue_into(&mut self, messages: &mut [Message], wait: i32) -> Result<usize> {
        let mut count = 0;
        for msg in messages.iter_mut() {
            if count == 1 && wait != OCI_DEQ_NO_WAIT {
                self.set_wait(OCI_DEQ_NO_WAIT)?;
            }
            let name = self.name.as_ptr() as *const u8;
            let (deq_options, props, tdo) = (self.deq_options.get(), self.props.get(), self.payload_tdo.get());
            let mut payload = self.payload.get() as *mut c_void;
            let mut ind_ptr = ptr::null_mut::<c_void>();
            let res = self.conn.with_session(|svc, env| {
                env.check_status(unsafe {
                    OCIAQDeq(svc, env.err_ptr(), name, deq_options, props, tdo, &mut payload, &mut ind_ptr, ptr::null_mut(), OCI_DEFAULT)
                }, "AQDeq")
            });
            match res {
                Err(err) if err.code() == Some(ORA_NO_MESSAGE_AVAILABLE) => break,
                Err(err) => return Err(err),
                Ok(()) => {}
            }
            self.payload = Ptr::new(payload as *mut OCIRaw);
            let mut received = self.message_properties()?;
            received.raw = self.payload_bytes();
            *msg = received;
            count += 1;
        }
        Ok(count)
    }

    /// Releases the descriptors. The queue is also closed when dropped.
    pub fn close(self) {}
}

impl std::fmt::Debug for Queue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_codes() {
        for mode in [DeqMode::Browse, DeqMode::Locked, DeqMode::Remove, DeqMode::RemoveNoData].iter() {
            assert_eq!(DeqMode::from_oci(mode.to_oci()), *mode);
        }
        for nav in [DeqNavigation::FirstMsg, DeqNavigation::NextTransaction, DeqNavigation::NextMsg].iter() {
            assert_eq!(DeqNavigation::from_oci(nav.to_oci()), *nav);
        }
        assert_eq!(Visibility::from_oci(OCI_ENQ_ON_COMMIT), Visibility::OnCommit);
        assert_eq!(Visibility::Immediate.to_oci(), 1);
    }

    #[test]
    fn default_message() {
        let msg = Message::default();
        assert!(msg.raw.is_empty());
        assert_eq!(msg.priority, 0);
        assert_eq!(msg.attempts, 0);
    }
}
