//! Keyboards and fixed UI text

use crate::telegram::ReplyMarkup;

pub const BTN_NEW_PROJECT: &str = "🆕 مشروع جديد";
pub const BTN_ADD_SPEC: &str = "📝 إضافة مواصفات";
pub const BTN_RUN: &str = "🚀 تشغيل مشروع";
pub const BTN_STATUS: &str = "📊 حالة المشروع";
pub const BTN_MY_PROJECTS: &str = "📁 مشاريعي";
pub const BTN_HELP: &str = "❓مساعدة";

/// Inline pickers show at most this many projects
pub const PICKER_LIMIT: usize = 8;

/// "My projects" lists at most this many
pub const LIST_LIMIT: usize = 12;

/// Free text longer than this (in chars) becomes a new project's spec
pub const QUICK_SPEC_MIN_CHARS: usize = 20;

pub const CALLBACK_RUN: &str = "run:";
pub const CALLBACK_STATUS: &str = "status:";

pub const WELCOME_TEXT: &str = "أهلًا 👋\nصار البوت أسهل باستخدام الأزرار.\nاختر من القائمة:";

pub const HELP_TEXT: &str = "الاستخدام السريع:\n1) 🆕 مشروع جديد\n2) 📝 إضافة مواصفات\n3) 🚀 تشغيل مشروع\n4) 📊 حالة المشروع";

pub const NO_PROJECT_YET: &str = "ما عندك مشروع بعد. اضغط 🆕 مشروع جديد أولًا.";
pub const NO_PROJECTS_TO_RUN: &str = "ما في مشاريع بعد. ابدأ بـ 🆕 مشروع جديد";
pub const NO_PROJECTS: &str = "ما في مشاريع بعد.";
pub const PICK_TO_RUN: &str = "اختر مشروع للتشغيل:";
pub const PICK_FOR_STATUS: &str = "اختر مشروع لمعرفة الحالة:";
pub const MENU_HINT: &str = "اختر زر من القائمة 👇";
pub const INVALID_PROJECT: &str = "⚠️ معرّف مشروع غير صالح";
pub const INTERNAL_ERROR: &str = "⚠️ صار خطأ داخلي، حاول مرة ثانية.";

/// Persistent main menu
pub fn main_keyboard() -> ReplyMarkup {
    ReplyMarkup::keyboard(&[
        &[BTN_NEW_PROJECT, BTN_ADD_SPEC],
        &[BTN_RUN, BTN_STATUS],
        &[BTN_MY_PROJECTS, BTN_HELP],
    ])
}

/// One inline button per project, each carrying `<prefix><project_id>`
pub fn project_picker(icon: &str, callback_prefix: &str, project_ids: &[String]) -> ReplyMarkup {
    ReplyMarkup::inline_column(
        project_ids
            .iter()
            .take(PICKER_LIMIT)
            .map(|id| (format!("{} {}", icon, id), format!("{}{}", callback_prefix, id))),
    )
}

pub fn project_created(project_id: &str) -> String {
    format!(
        "✅ تم إنشاء مشروع: {}\n\nأرسل الآن وصف المشروع/المواصفات في رسالة واحدة وأنا أحفظها مباشرة.",
        project_id
    )
}

pub fn send_spec_for(project_id: &str) -> String {
    format!("أرسل مواصفات المشروع الآن لـ {}", project_id)
}

pub fn spec_saved(project_id: &str) -> String {
    format!("✅ تم حفظ المواصفات للمشروع {}\nالآن اضغط 🚀 تشغيل مشروع", project_id)
}

pub fn quick_project_created(project_id: &str) -> String {
    format!("✅ أنشأت مشروع جديد وحفظت المواصفات: {}\nاضغط 🚀 تشغيل مشروع", project_id)
}

pub fn project_list(project_ids: &[String]) -> String {
    let lines: Vec<String> = project_ids.iter().map(|id| format!("- {}", id)).collect();
    format!("آخر المشاريع:\n{}", lines.join("\n"))
}
