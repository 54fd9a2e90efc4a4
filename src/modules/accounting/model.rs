pub use schoolbase_models::accounting::{
    AccountingSummary, Assets, BalanceSheet, CreateExpenseDto, CreatePayrollDto, Expense,
    ExpenseFilterParams, Liabilities, MonthParams, MonthlyPoint, Payroll, PayrollFilterParams,
    ProfitAndLoss, SeriesParams, UpdateExpenseDto, UpdatePayrollDto, expenses_csv, invoices_csv,
    month_label, month_range, payroll_csv, trailing_months,
};
