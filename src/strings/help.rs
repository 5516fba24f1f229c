//! # Help Text
//!
//! Help messages for bot commands. Displayed via the `.help` command.

pub const APPLICANT: &str = concat!(
    "**🤖 Recruiter Help**\n",
    "Use: .command\n",
    "\n",
    "* start: Begin an application\n",
    "* cancel: Abandon the current application\n",
    "* help: This message\n"
);

pub const REVIEWER: &str = concat!(
    "\n",
    "**🛡️ Reviewer**\n",
    "* approve_[user] / reject_[user]: Decide on an application\n",
    "* pause: Stop accepting new applications\n",
    "* resume: Accept new applications again\n",
    "* status: Intake, open sessions and pending decisions\n"
);
