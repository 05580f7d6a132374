//! 出站文本格式
//!
//! 所有出站消息都是一行纯文本，行终止符由写出端追加。

use crate::value_objects::PresenceEntry;

pub const ONLINE: &str = "已上线";
pub const OFFLINE: &str = "已下线";
pub const LISTED: &str = "在线...";
pub const SENT: &str = "发送成功";
pub const IDLE_KICKED: &str = "你已超时，已被踢出服务器";
pub const FORCE_KICKED: &str = "你已被踢出服务器";

/// 公聊、上线、下线广播：`[<addr>]<name>: <text>`
pub fn announcement(address: &str, name: &str, text: &str) -> String {
    format!("[{address}]{name}: {text}")
}

/// `who` 的单行结果
pub fn presence_line(entry: &PresenceEntry) -> String {
    announcement(&entry.address, &entry.name, LISTED)
}

/// 投递给私聊对象的内容：`<name>: <text>`
pub fn direct_message(sender: &str, text: &str) -> String {
    format!("{sender}: {text}")
}

pub fn renamed(new_name: &str) -> String {
    format!("您已经更新用户名:{new_name}")
}
