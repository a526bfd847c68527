//! Fixed user-facing strings. The product ships in Hebrew.

pub const WELCOME_MESSAGE: &str = "שלום! אני אדריכל הפרומפטים שלך. תאר לי מה תרצה ליצור, ואני אבנה עבורך את הפרומפט המושלם. אתה יכול גם להעלות תמונה לניתוח.";

pub const CONVERSATION_FAILURE_MESSAGE: &str =
    "סליחה, נתקלתי בשגיאה ביצירת הפרומפט. אנא נסה שוב.";

pub const IMAGE_FAILURE_MESSAGE: &str =
    "נכשל ביצירת תמונה. נסה לשנות את הפרומפט או לפשט את הפרמטרים.";

/// History title for a conversation turn that carried only an image.
pub const IMAGE_ANALYSIS_TITLE: &str = "ניתוח תמונה";

pub const EMPTY_HISTORY_MESSAGE: &str = "אין היסטוריה עדיין.";

pub const ARCHITECT_VIEW_TITLE: &str = "אדריכל פרומפטים";

pub const WALLPAPER_VIEW_TITLE: &str = "מחולל טפטים";

pub const SURPRISE_PROMPTS: &[&str] = &[
    "עיר עתידנית המרחפת בין העננים בזריחה",
    "דרקון עשוי קריסטלים ישן בתוך מערה זוהרת",
    "דוכן אוכל רחוב בסגנון סייברפאנק בטוקיו הגשומה",
    "אסטרונאוט עושה מדיטציה על פני מאדים",
    "מכונת קפה בסגנון סטימפאנק עם פרטים מורכבים",
];
