// ==========================================
// 资产盘点 - 表格读取器实现
// ==========================================
// 职责: 将分隔符文本 / 电子表格统一为惰性行序列
// 支持: 分号分隔文本（Windows-1251，无引号转义）/ 电子表格（首个工作表）
// ==========================================

use crate::domain::import::{CellKind, RawCell, RawRow, SourceKind, SourcePreview};
use crate::importer::error::{ImportError, ImportResult, RowError};
use crate::importer::import_trait::TabularReader;
use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use chrono::{Duration, NaiveDate};
use csv::{ReaderBuilder, StringRecordsIntoIter};
use encoding_rs::WINDOWS_1251;
use std::collections::VecDeque;
use std::io::Cursor;
use tracing::{debug, warn};

type RowResult = Result<RawRow, RowError>;

// ==========================================
// RowStream - 惰性行序列
// ==========================================
// 单遍迭代；允许预读前缀用于列推断，预读的行仍会按序产出
pub struct RowStream {
    inner: Box<dyn Iterator<Item = RowResult> + Send>,
    buffered: VecDeque<RowResult>,
}

impl RowStream {
    pub fn new<I>(rows: I) -> Self
    where
        I: Iterator<Item = RowResult> + Send + 'static,
    {
        Self {
            inner: Box::new(rows),
            buffered: VecDeque::new(),
        }
    }

    /// 预读前 n 行（不消费），解析失败的行以空行代替
    pub fn peek_rows(&mut self, n: usize) -> Vec<RawRow> {
        while self.buffered.len() < n {
            match self.inner.next() {
                Some(row) => self.buffered.push_back(row),
                None => break,
            }
        }

        self.buffered
            .iter()
            .take(n)
            .map(|row| match row {
                Ok(row) => row.clone(),
                Err(e) => RawRow::blank(e.row),
            })
            .collect()
    }
}

impl Iterator for RowStream {
    type Item = RowResult;

    fn next(&mut self) -> Option<Self::Item> {
        self.buffered.pop_front().or_else(|| self.inner.next())
    }
}

// ==========================================
// DelimitedTextReader - 分隔符文本读取器
// ==========================================
pub struct DelimitedTextReader {
    delimiter: u8,
}

impl DelimitedTextReader {
    pub fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }
}

impl Default for DelimitedTextReader {
    fn default() -> Self {
        Self::new(b';')
    }
}

impl TabularReader for DelimitedTextReader {
    fn open(&self, bytes: Vec<u8>, kind: SourceKind) -> ImportResult<RowStream> {
        if kind != SourceKind::DelimitedText {
            return Err(ImportError::UnsupportedSource(kind.as_str().to_string()));
        }

        // 带 BOM 的输入按 BOM 指定编码解码，否则按 Windows-1251
        let (text, encoding, had_errors) = WINDOWS_1251.decode(&bytes);
        if had_errors {
            warn!(encoding = encoding.name(), "文本中存在无法解码的字节，已替换");
        }
        debug!(encoding = encoding.name(), bytes = bytes.len(), "分隔符文本解码完成");

        let reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .flexible(true) // 允许行长度不一致
            .quoting(false)
            .from_reader(Cursor::new(text.into_owned().into_bytes()));

        Ok(RowStream::new(DelimitedRows::new(reader.into_records())))
    }
}

/// 按物理行号产出；csv 跳过的空行补为空白行，行号与电子表格一致
struct DelimitedRows {
    records: StringRecordsIntoIter<Cursor<Vec<u8>>>,
    next_index: usize,
    pending: Option<(usize, RowResult)>,
}

impl DelimitedRows {
    fn new(records: StringRecordsIntoIter<Cursor<Vec<u8>>>) -> Self {
        Self {
            records,
            next_index: 0,
            pending: None,
        }
    }

    fn read_next(&mut self) -> Option<(usize, RowResult)> {
        let result = self.records.next()?;
        let fallback = self.next_index;
        // csv 行号从 1 开始
        let line = |position: Option<&csv::Position>| {
            position
                .map(|p| (p.line() as usize).saturating_sub(1))
                .unwrap_or(fallback)
                .max(fallback)
        };

        Some(match result {
            Ok(record) => {
                let index = line(record.position());
                let cells = record.iter().map(RawCell::text).collect();
                (index, Ok(RawRow::new(index, cells)))
            }
            Err(e) => {
                let index = line(e.position());
                (index, Err(RowError::malformed(index, &e)))
            }
        })
    }
}

impl Iterator for DelimitedRows {
    type Item = RowResult;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pending.is_none() {
            self.pending = self.read_next();
        }
        let (index, _) = self.pending.as_ref()?;

        if *index > self.next_index {
            let gap = RawRow::blank(self.next_index);
            self.next_index += 1;
            return Some(Ok(gap));
        }

        let (index, row) = self.pending.take()?;
        self.next_index = index + 1;
        Some(row)
    }
}

// ==========================================
// SpreadsheetReader - 电子表格读取器
// ==========================================
pub struct SpreadsheetReader;

impl TabularReader for SpreadsheetReader {
    fn open(&self, bytes: Vec<u8>, kind: SourceKind) -> ImportResult<RowStream> {
        if kind != SourceKind::Spreadsheet {
            return Err(ImportError::UnsupportedSource(kind.as_str().to_string()));
        }

        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;

        // 仅读取第一个工作表
        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ImportError::Format("工作簿不含工作表".to_string()))?;

        let values = workbook.worksheet_range(&sheet_name)?;
        let formulas = match workbook.worksheet_formula(&sheet_name) {
            Ok(range) => Some(range),
            Err(e) => {
                debug!(sheet = %sheet_name, error = %e, "公式读取失败，仅使用缓存值");
                None
            }
        };

        debug!(
            sheet = %sheet_name,
            start = ?values.start(),
            end = ?values.end(),
            "工作表已加载"
        );

        Ok(RowStream::new(SheetRows::new(values, formulas)))
    }
}

/// 按绝对行号 0..=最后一行 逐行产出；范围之外的行与列记为空白
struct SheetRows {
    values: Range<Data>,
    formulas: Option<Range<String>>,
    next_row: u32,
    last_row: Option<u32>,
    last_col: u32,
}

impl SheetRows {
    fn new(values: Range<Data>, formulas: Option<Range<String>>) -> Self {
        let value_end = values.end();
        let formula_end = formulas.as_ref().and_then(|f| f.end());

        let last_row = match (value_end, formula_end) {
            (Some(v), Some(f)) => Some(v.0.max(f.0)),
            (Some(v), None) => Some(v.0),
            (None, Some(f)) => Some(f.0),
            (None, None) => None,
        };
        let last_col = value_end
            .map(|v| v.1)
            .into_iter()
            .chain(formula_end.map(|f| f.1))
            .max()
            .unwrap_or(0);

        Self {
            values,
            formulas,
            next_row: 0,
            last_row,
            last_col,
        }
    }

    fn cell(&self, row: u32, col: u32) -> RawCell {
        let cached = self.values.get_value((row, col));
        let formula = self
            .formulas
            .as_ref()
            .and_then(|f| f.get_value((row, col)))
            .filter(|f| !f.is_empty());

        match (formula, cached) {
            // 公式：优先缓存结果，缓存不可读时回退为公式文本
            (Some(formula), None | Some(Data::Empty) | Some(Data::Error(_))) => {
                RawCell::new(CellKind::FormulaResult, formula.as_str())
            }
            (Some(_), Some(value)) => {
                RawCell::new(CellKind::FormulaResult, render_cell(value).text)
            }
            (None, Some(value)) => render_cell(value),
            (None, None) => RawCell::blank(),
        }
    }
}

impl Iterator for SheetRows {
    type Item = RowResult;

    fn next(&mut self) -> Option<Self::Item> {
        let last_row = self.last_row?;
        if self.next_row > last_row {
            return None;
        }

        let row = self.next_row;
        self.next_row += 1;

        let cells = (0..=self.last_col).map(|col| self.cell(row, col)).collect();
        Some(Ok(RawRow::new(row as usize, cells)))
    }
}

// ==========================================
// UniversalTabularReader - 按数据源类型分派
// ==========================================
pub struct UniversalTabularReader {
    delimited: DelimitedTextReader,
    spreadsheet: SpreadsheetReader,
}

impl UniversalTabularReader {
    pub fn new(delimiter: u8) -> Self {
        Self {
            delimited: DelimitedTextReader::new(delimiter),
            spreadsheet: SpreadsheetReader,
        }
    }
}

impl Default for UniversalTabularReader {
    fn default() -> Self {
        Self::new(b';')
    }
}

impl TabularReader for UniversalTabularReader {
    fn open(&self, bytes: Vec<u8>, kind: SourceKind) -> ImportResult<RowStream> {
        match kind {
            SourceKind::DelimitedText => self.delimited.open(bytes, kind),
            SourceKind::Spreadsheet => self.spreadsheet.open(bytes, kind),
        }
    }
}

// ==========================================
// 单元格渲染
// ==========================================

/// 数值渲染：整数值不带小数点；小数按默认十进制表示；从不使用分组符或指数
pub fn render_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

/// Excel 序列日期 → 文本（1900 日期系统）
pub fn render_serial_date(serial: f64) -> String {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30).and_then(|d| d.and_hms_opt(0, 0, 0));
    let millis = (serial * 86_400_000.0).round();

    // 超出日期范围的序列值按数字渲染
    let datetime = epoch
        .filter(|_| millis.is_finite() && millis.abs() < 1e17)
        .and_then(|epoch| epoch.checked_add_signed(Duration::milliseconds(millis as i64)));

    match datetime {
        Some(datetime) if serial.fract() == 0.0 => datetime.format("%Y-%m-%d").to_string(),
        Some(datetime) => datetime.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => render_number(serial),
    }
}

pub fn render_cell(value: &Data) -> RawCell {
    match value {
        Data::Empty => RawCell::blank(),
        // 导出工具遗留的双引号转义
        Data::String(s) => RawCell::text(&s.replace("\"\"", "\"")),
        Data::Float(f) => RawCell::new(CellKind::Number, render_number(*f)),
        Data::Int(i) => RawCell::new(CellKind::Number, i.to_string()),
        Data::Bool(b) => RawCell::new(CellKind::Boolean, b.to_string()),
        Data::DateTime(dt) => RawCell::new(CellKind::Date, render_serial_date(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => RawCell::new(CellKind::Date, s.as_str()),
        Data::Error(e) => RawCell::new(CellKind::String, e.to_string()),
    }
}

// ==========================================
// 数据源预览
// ==========================================

/// 预览前 max_rows 行、每行前 max_cols 列
pub fn preview(
    mut stream: RowStream,
    kind: SourceKind,
    max_rows: usize,
    max_cols: usize,
) -> SourcePreview {
    let mut rows = stream.peek_rows(max_rows + 1);
    let truncated = rows.len() > max_rows;
    rows.truncate(max_rows);

    for row in &mut rows {
        row.cells.truncate(max_cols);
    }

    SourcePreview {
        source_kind: kind,
        rows,
        truncated,
    }
}
