//! Plugin contract and host
//!
//! Plugins observe the viewer through hooks, decorate pages with attributes
//! and layers, and steer it by queueing commands on their [`PluginContext`].
//! Commands are executed when the viewer drains them, never re-entrantly
//! from inside a hook.

use std::sync::Arc;

use flume::Sender;
use log::{debug, info};
use serde::Serialize;

use crate::attributes::Attributes;
use crate::document::{Destination, DocumentInfo};
use crate::error::{Result, ViewerError};
use crate::frame::{Layer, PageSlot};
use crate::localization::Localization;
use crate::scheduler::RenderStatus;
use crate::view::{Command, RotateDirection, ScrollMode, ViewMode, ViewerState, ZoomLevel};

/// Viewer state as plugins see it
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ViewerSnapshot {
    pub document: String,
    pub page_count: usize,
    pub current_page: usize,
    pub scale: f32,
    pub zoom: ZoomLevel,
    pub rotation: u16,
    pub scroll_mode: ScrollMode,
    pub view_mode: ViewMode,
}

impl ViewerSnapshot {
    #[must_use]
    pub fn capture(state: &ViewerState, document: &str) -> Self {
        Self {
            document: document.to_string(),
            page_count: state.page_count,
            current_page: state.current_page,
            scale: state.scale,
            zoom: state.zoom,
            rotation: state.rotation.degrees(),
            scroll_mode: state.scroll_mode,
            view_mode: state.view_mode,
        }
    }
}

/// Queues viewer commands from plugins
#[derive(Clone, Debug)]
pub struct CommandSender(Sender<Command>);

impl CommandSender {
    #[must_use]
    pub fn new(sender: Sender<Command>) -> Self {
        Self(sender)
    }

    /// False once the viewer is gone
    pub fn send(&self, cmd: Command) -> bool {
        self.0.send(cmd).is_ok()
    }

    pub fn jump_to_page(&self, page: usize) -> bool {
        self.send(Command::JumpToPage(page))
    }

    pub fn jump_to_destination(&self, dest: Destination) -> bool {
        self.send(Command::JumpToDestination(dest))
    }

    pub fn zoom(&self, level: ZoomLevel) -> bool {
        self.send(Command::Zoom(level))
    }

    pub fn rotate(&self, direction: RotateDirection) -> bool {
        self.send(Command::Rotate(direction))
    }

    pub fn rotate_page(&self, page: usize, direction: RotateDirection) -> bool {
        self.send(Command::RotatePage { page, direction })
    }

    pub fn switch_scroll_mode(&self, mode: ScrollMode) -> bool {
        self.send(Command::SwitchScrollMode(mode))
    }

    pub fn switch_view_mode(&self, mode: ViewMode) -> bool {
        self.send(Command::SwitchViewMode(mode))
    }
}

/// Handed to a plugin on install
#[derive(Clone, Debug)]
pub struct PluginContext {
    pub commands: CommandSender,
    pub localization: Arc<Localization>,
}

/// Extension hooks; every hook defaults to doing nothing
pub trait Plugin {
    /// Unique name, used to uninstall
    fn name(&self) -> &str;

    fn install(&mut self, _ctx: &PluginContext) -> Result<()> {
        Ok(())
    }

    fn uninstall(&mut self) {}

    fn on_document_load(&mut self, _info: &DocumentInfo) {}

    /// Receives the snapshot returned by the previous plugin
    fn on_viewer_state_change(&mut self, snapshot: ViewerSnapshot) -> ViewerSnapshot {
        snapshot
    }

    fn on_page_change(&mut self, _page: usize) {}

    fn on_render_status(&mut self, _page: usize, _status: RenderStatus) {}

    fn viewer_attributes(&self, _attrs: &mut Attributes) {}

    fn page_attributes(&self, _slot: &PageSlot, _attrs: &mut Attributes) {}

    fn render_page_layers(&self, _slot: &PageSlot) -> Vec<Layer> {
        Vec::new()
    }
}

/// Installed plugins, in installation order
#[derive(Default)]
pub struct PluginHost {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.plugins.iter().map(|p| p.name())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names().any(|n| n == name)
    }

    /// Install a plugin; names must be unique
    pub fn install(
        &mut self,
        mut plugin: Box<dyn Plugin>,
        ctx: &PluginContext,
    ) -> Result<&mut dyn Plugin> {
        let name = plugin.name().to_string();
        if self.contains(&name) {
            return Err(ViewerError::DuplicatePlugin(name));
        }
        plugin.install(ctx)?;
        info!("Installed plugin {name}");
        self.plugins.push(plugin);
        let last = self.plugins.len() - 1;
        Ok(self.plugins[last].as_mut())
    }

    /// Uninstall a plugin by name and hand it back
    pub fn uninstall(&mut self, name: &str) -> Option<Box<dyn Plugin>> {
        let idx = self.plugins.iter().position(|p| p.name() == name)?;
        let mut plugin = self.plugins.remove(idx);
        plugin.uninstall();
        info!("Uninstalled plugin {name}");
        Some(plugin)
    }

    /// Uninstall everything, newest first
    pub fn uninstall_all(&mut self) {
        while let Some(mut plugin) = self.plugins.pop() {
            plugin.uninstall();
            debug!("Uninstalled plugin {}", plugin.name());
        }
    }

    pub fn document_loaded(&mut self, info: &DocumentInfo) {
        for plugin in &mut self.plugins {
            plugin.on_document_load(info);
        }
    }

    /// Pass the snapshot through every plugin in order
    pub fn state_changed(&mut self, snapshot: ViewerSnapshot) -> ViewerSnapshot {
        self.plugins
            .iter_mut()
            .fold(snapshot, |snapshot, plugin| plugin.on_viewer_state_change(snapshot))
    }

    pub fn page_changed(&mut self, page: usize) {
        for plugin in &mut self.plugins {
            plugin.on_page_change(page);
        }
    }

    pub fn render_status_changed(&mut self, page: usize, status: RenderStatus) {
        for plugin in &mut self.plugins {
            plugin.on_render_status(page, status);
        }
    }

    pub fn viewer_attributes(&self, attrs: &mut Attributes) {
        for plugin in &self.plugins {
            plugin.viewer_attributes(attrs);
        }
    }

    pub fn page_attributes(&self, slot: &PageSlot, attrs: &mut Attributes) {
        for plugin in &self.plugins {
            plugin.page_attributes(slot, attrs);
        }
    }

    pub fn page_layers(&self, slot: &PageSlot) -> Vec<Layer> {
        self.plugins
            .iter()
            .flat_map(|plugin| plugin.render_page_layers(slot))
            .collect()
    }
}
