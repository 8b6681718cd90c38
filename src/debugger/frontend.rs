use crate::debugger::vm::Vm;
use crate::debugger::Debugger;
use crate::protocol::channel::{ProtocolChannel, Received};
use crate::protocol::events::Notification;
use crate::protocol::{DispatchRequest, Response};
use crate::{agent_warn, muted_error, weak_error};

/// Connection to the frontend plus the "VM waits for the debugger" flag.
pub struct Frontend {
    channel: Option<Box<dyn ProtocolChannel>>,
    waiting: bool,
}

impl Frontend {
    pub fn new(channel: Option<Box<dyn ProtocolChannel>>) -> Self {
        Self {
            channel,
            waiting: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_some()
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    fn send_notification(&self, notification: Notification) {
        if let Some(channel) = &self.channel {
            weak_error!(
                channel.send_notification(notification),
                "send notification:"
            );
        }
    }

    fn send_response(&self, response: Response) {
        if let Some(channel) = &self.channel {
            muted_error!(channel.send_response(response), "send response:");
        }
    }

    fn detach(&mut self) -> Option<Box<dyn ProtocolChannel>> {
        self.waiting = false;
        self.channel.take()
    }
}

impl<V: Vm> Debugger<V> {
    /// Notifications go out only for an enabled session with a connected frontend.
    fn allow_notify(&self) -> bool {
        self.session.enabled && self.frontend.is_connected()
    }

    pub(super) fn notify(&self, notification: Notification) {
        if self.allow_notify() {
            self.frontend.send_notification(notification);
        }
    }

    /// Release a waiting VM and tell the frontend that execution continues.
    pub(super) fn resumed(&mut self) {
        if !self.allow_notify() {
            return;
        }
        self.frontend.waiting = false;
        self.frontend.send_notification(Notification::Resumed);
    }

    pub fn run_if_waiting_for_debugger(&mut self) {
        self.frontend.waiting = false;
    }

    /// Serve requests on the VM thread until one of them resumes execution.
    ///
    /// The wait ends by itself when the pause timeout elapses (execution resumes)
    /// or when the transport disconnects (the session is disabled).
    pub(super) fn wait_for_debugger(&mut self, vm: &mut V) {
        if !self.allow_notify() {
            return;
        }
        self.frontend.waiting = true;
        let timeout = self.config.pause_timeout();

        while self.frontend.waiting {
            let received = match &self.frontend.channel {
                Some(channel) => channel.receive(timeout),
                None => break,
            };
            match received {
                Received::Message(request) => self.handle_request(vm, request),
                Received::Timeout => {
                    agent_warn!(target: "debugger", "no resuming command in {timeout:?}, resume execution");
                    self.resume();
                }
                Received::Disconnected => {
                    agent_warn!(target: "debugger", "frontend disconnected, disable debugger");
                    self.disable(vm);
                    self.frontend.detach();
                }
            }
        }
        self.frontend.waiting = false;
    }

    /// Serve every already queued request without blocking.
    pub fn handle_protocol_commands(&mut self, vm: &mut V) {
        loop {
            let next = self
                .frontend
                .channel
                .as_ref()
                .and_then(|channel| channel.try_receive());
            let Some(request) = next else {
                break;
            };
            self.handle_request(vm, request);
        }
    }

    fn handle_request(&mut self, vm: &mut V, request: DispatchRequest) {
        let response = self.dispatch(vm, request);
        self.frontend.send_response(response);
    }
}
