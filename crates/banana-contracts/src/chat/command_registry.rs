#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
    pub arg_key: &'static str,
}

/// Commands whose whole remainder is one free-text argument.
pub(crate) const RAW_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "style",
        action: "set_style",
        arg_key: "style",
    },
    CommandSpec {
        command: "ratio",
        action: "set_ratio",
        arg_key: "ratio",
    },
    CommandSpec {
        command: "image",
        action: "generate_image",
        arg_key: "prompt",
    },
    CommandSpec {
        command: "open",
        action: "open_history_entry",
        arg_key: "id",
    },
];

pub(crate) const SINGLE_PATH_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "attach",
        action: "attach",
        arg_key: "path",
    },
    CommandSpec {
        command: "export",
        action: "export_image",
        arg_key: "path",
    },
];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "help",
        action: "help",
        arg_key: "",
    },
    CommandSpec {
        command: "detach",
        action: "detach",
        arg_key: "",
    },
    CommandSpec {
        command: "surprise",
        action: "surprise",
        arg_key: "",
    },
    CommandSpec {
        command: "history",
        action: "show_history",
        arg_key: "",
    },
    CommandSpec {
        command: "clear_history",
        action: "clear_history",
        arg_key: "",
    },
    CommandSpec {
        command: "copy",
        action: "copy_last",
        arg_key: "",
    },
    CommandSpec {
        command: "styles",
        action: "list_styles",
        arg_key: "",
    },
    CommandSpec {
        command: "ratios",
        action: "list_ratios",
        arg_key: "",
    },
    CommandSpec {
        command: "quit",
        action: "quit",
        arg_key: "",
    },
    CommandSpec {
        command: "exit",
        action: "quit",
        arg_key: "",
    },
];

pub const CHAT_HELP_COMMANDS: &[&str] = &[
    "/style <id>",
    "/ratio <w:h>",
    "/attach <path>",
    "/detach",
    "/surprise",
    "/image <prompt>",
    "/export [dir]",
    "/history",
    "/open <id>",
    "/clear_history",
    "/copy",
    "/styles",
    "/ratios",
    "/quit",
];
